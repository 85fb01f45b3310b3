//! Key schema
//!
//! Names and versions are opaque, so each component is escaped before it is
//! joined: `\` becomes `\\` and `:` becomes `\:`. An unescaped `:` is always
//! a separator, which keeps distinct (name, version) pairs on distinct keys.

use std::borrow::Cow;

use crate::artifact::ArtifactKey;

fn escape(component: &str) -> Cow<'_, str> {
    if !component.contains(['\\', ':']) {
        return Cow::Borrowed(component);
    }

    let mut escaped = String::with_capacity(component.len() + 4);
    for c in component.chars() {
        if c == '\\' || c == ':' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

pub fn upload_lock(key: &ArtifactKey) -> String {
    format!("lock:upload:{}:{}", escape(&key.name), escape(&key.version))
}

pub fn record(key: &ArtifactKey) -> String {
    format!("file:{}:{}", escape(&key.name), escape(&key.version))
}

pub fn versions(name: &str) -> String {
    format!("file:{}:versions", escape(name))
}

pub fn latest(name: &str) -> String {
    format!("file:{}:latest", escape(name))
}

pub fn last_seen(subscriber_id: &str) -> String {
    format!("consumer:{}:last_seen", escape(subscriber_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = ArtifactKey::new("w1", "1.0.0").unwrap();

        assert_eq!(upload_lock(&key), "lock:upload:w1:1.0.0");
        assert_eq!(record(&key), "file:w1:1.0.0");
        assert_eq!(versions("w1"), "file:w1:versions");
        assert_eq!(latest("w1"), "file:w1:latest");
        assert_eq!(last_seen("c1"), "consumer:c1:last_seen");
    }

    #[test]
    fn test_separator_in_components() {
        let left = ArtifactKey::new("a:b", "c").unwrap();
        let right = ArtifactKey::new("a", "b:c").unwrap();

        assert_ne!(record(&left), record(&right));
        assert_ne!(upload_lock(&left), upload_lock(&right));
        assert_eq!(record(&left), r"file:a\:b:c");
        assert_eq!(record(&right), r"file:a:b\:c");

        let slashed = ArtifactKey::new(r"a\", "b").unwrap();
        let plain = ArtifactKey::new("a", r"\b").unwrap();
        assert_ne!(record(&slashed), record(&plain));
    }
}
