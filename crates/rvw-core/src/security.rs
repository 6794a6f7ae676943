use crate::domain::UserId;

/// Whether `user_id` may run admin commands such as `/broadcast`.
pub fn is_admin(user_id: Option<UserId>, admin_users: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if admin_users.is_empty() {
        return false;
    }
    admin_users.contains(&user_id.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_or_missing_users_are_not_admins() {
        assert!(!is_admin(None, &[1]));
        assert!(!is_admin(Some(UserId(2)), &[1]));
        assert!(!is_admin(Some(UserId(1)), &[]));
        assert!(is_admin(Some(UserId(1)), &[3, 1]));
    }
}
