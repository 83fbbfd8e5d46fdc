//! Formatting and argument parsing helpers

use glam::Vec3;
use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a vector with fixed precision
pub fn format_vec3(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}

/// Parse `x,y,z` into three floats
pub fn parse_vec3(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{s}'"));
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|e| format!("invalid coordinate '{part}': {e}"))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1,2.5,-3"), Ok([1.0, 2.5, -3.0]));
        assert_eq!(parse_vec3(" 0, 0 ,0"), Ok([0.0; 3]));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,x,3").is_err());
    }

    #[test]
    fn test_format_vec3() {
        assert_eq!(format_vec3(Vec3::new(1.0, -0.5, 2.0)), "(1.000, -0.500, 2.000)");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.02 kB");
    }
}
