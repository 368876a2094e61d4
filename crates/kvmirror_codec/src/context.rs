//! User info visible to `Serialize`/`Deserialize` impls during a codec call.

use crate::options::UserInfo;
use std::cell::RefCell;

// Innermost call last; nested calls shadow outer ones.
thread_local! {
    static USER_INFO: RefCell<Vec<UserInfo>> = const { RefCell::new(Vec::new()) };
}

struct Scope;

impl Drop for Scope {
    fn drop(&mut self) {
        USER_INFO.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `info` installed for the current thread.
pub(crate) fn scoped<R>(info: &UserInfo, f: impl FnOnce() -> R) -> R {
    USER_INFO.with(|stack| stack.borrow_mut().push(info.clone()));
    let _scope = Scope;
    f()
}

/// Looks up `key` in the user info of the encode or decode running on this
/// thread.
///
/// Returns `None` outside a codec call or when the active options carry no
/// such entry.
///
/// ```
/// use kvmirror_codec::{to_tree, user_info, EncodingOptions};
/// use serde::{Serialize, Serializer};
///
/// struct Price(u32);
///
/// impl Serialize for Price {
///     fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
///         let currency = user_info("currency").unwrap_or_else(|| "EUR".into());
///         serializer.collect_str(&format_args!("{} {currency}", self.0))
///     }
/// }
///
/// let options = EncodingOptions::default().with_user_info("currency", "USD");
/// assert_eq!(to_tree(&Price(5), &options).unwrap(), "5 USD");
/// assert_eq!(to_tree(&Price(5), &EncodingOptions::default()).unwrap(), "5 EUR");
/// ```
pub fn user_info(key: &str) -> Option<String> {
    USER_INFO.with(|stack| {
        stack
            .borrow()
            .last()
            .and_then(|info| info.get(key).cloned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_is_restored_after_nested_calls() {
        let outer: UserInfo = [("role".to_string(), "outer".to_string())].into();
        let inner: UserInfo = [("role".to_string(), "inner".to_string())].into();

        assert_eq!(user_info("role"), None);
        scoped(&outer, || {
            assert_eq!(user_info("role").as_deref(), Some("outer"));
            scoped(&inner, || {
                assert_eq!(user_info("role").as_deref(), Some("inner"));
            });
            assert_eq!(user_info("role").as_deref(), Some("outer"));
        });
        assert_eq!(user_info("role"), None);
    }

    #[test]
    fn scope_is_restored_after_panic() {
        let info: UserInfo = [("k".to_string(), "v".to_string())].into();
        let result = std::panic::catch_unwind(|| scoped(&info, || panic!("boom")));
        assert!(result.is_err());
        assert_eq!(user_info("k"), None);
    }
}
