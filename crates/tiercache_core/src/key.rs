// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache key composition.

/// The separator placed between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Joins ordered namespace segments into a single cache key.
///
/// Segments are joined with [`KEY_SEPARATOR`] and are not escaped, so a segment that itself
/// contains `:` can collide with a different segmentation. Callers that need uniqueness must keep
/// the separator out of their segments.
///
/// # Examples
///
/// ```
/// use tiercache_core::make_key;
///
/// assert_eq!(make_key(["user", "42", "profile"]), "user:42:profile");
/// assert_eq!(make_key(Vec::<String>::new()), "");
/// ```
pub fn make_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for (index, part) in parts.into_iter().enumerate() {
        if index > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(part.as_ref());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_segments_produce_same_key() {
        assert_eq!(make_key(["a", "b"]), make_key(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn different_segments_produce_different_keys() {
        assert_ne!(make_key(["a", "b"]), make_key(["b", "a"]));
        assert_ne!(make_key(["a", "b"]), make_key(["a", "b", "c"]));
        assert_ne!(make_key(["a"]), make_key(["a", ""]));
    }

    #[test]
    fn single_segment_is_unchanged() {
        assert_eq!(make_key(["only"]), "only");
    }

    #[test]
    fn embedded_separator_is_not_escaped() {
        assert_eq!(make_key(["a:b", "c"]), make_key(["a", "b:c"]));
    }
}
