use glob::glob;
use std::fs;

/// True if any process holds `port_name` open, judged from `/proc/*/fd`.
pub fn is_port_open(port_name: &str) -> bool {
    let paths = match glob("/proc/[0-9]*/fd/*") {
        Ok(paths) => paths,
        Err(_) => return false,
    };

    paths
        .filter_map(|p| p.ok())
        .filter_map(|path| fs::read_link(path).ok())
        .any(|link| link.to_str() == Some(port_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_not_open() {
        assert!(!is_port_open("/dev/lpb40b-does-not-exist"));
    }
}
