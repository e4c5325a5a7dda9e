use crate::domain::UserId;

/// Access guard: a user may operate the bot iff their numeric id, stringified,
/// is in the configured admin list. Every command and callback handler checks
/// this before touching the repository or the backup producer.
pub fn is_authorized(user_id: Option<UserId>, admin_ids: &[String]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if admin_ids.is_empty() {
        return false;
    }
    let id = user_id.0.to_string();
    admin_ids.iter().any(|admin| admin == &id)
}
