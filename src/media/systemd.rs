use super::MediaReference;
use std::path::Path;

/// Escapes a path into a systemd unit name, as `systemd-escape --path` does.
pub fn unit_name(path: &Path, suffix: &str) -> String {
    let path = path.to_string_lossy();
    let trimmed = path.trim_matches('/');

    if trimmed.is_empty() {
        return ["-.", suffix].concat();
    }

    let mut name = String::with_capacity(trimmed.len() + suffix.len() + 1);
    for (index, byte) in trimmed.bytes().enumerate() {
        match byte {
            b'/' => name.push('-'),
            b'.' if index == 0 => name.push_str("\\x2e"),
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b':' | b'_' | b'.' => name.push(byte as char),
            _ => name.push_str(&format!("\\x{:02x}", byte)),
        }
    }

    name.push('.');
    name.push_str(suffix);
    name
}

/// The contents of a mount unit which mounts `media` during early boot.
pub fn mount_unit(media: &MediaReference, options: &str) -> String {
    fomat!(
        "[Unit]\n"
        "Description=System Upgrade Media\n"
        "DefaultDependencies=no\n"
        "Before=local-fs.target\n"
        "\n"
        "[Mount]\n"
        "What=" (media.dev.display()) "\n"
        "Where=" (media.mnt.display()) "\n"
        "Type=" (media.fstype) "\n"
        "Options=" (options) "\n"
    )
}
