use super::UploadError;
use staffdesk_core::constants::MAX_FILENAME_LENGTH;
use std::path::{Component, Path};

/// A bare file name: no separators, no `..`, no control characters.
pub fn validate_filename(filename: &str) -> Result<(), UploadError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(UploadError::Validation("Filename cannot be empty".to_string()));
    }
    if trimmed.len() > MAX_FILENAME_LENGTH {
        return Err(UploadError::Validation(format!(
            "Filename exceeds {} characters",
            MAX_FILENAME_LENGTH
        )));
    }
    if trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
        || trimmed.chars().any(char::is_control)
    {
        return Err(UploadError::Validation(format!(
            "Filename contains invalid characters: {}",
            filename
        )));
    }
    Ok(())
}

/// A relative path made only of plain segments.
pub fn validate_relative_path(path: &str, field: &str) -> Result<(), UploadError> {
    let invalid = || UploadError::Validation(format!("Invalid {}: {}", field, path));

    let trimmed = path.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed.contains('\\')
        || trimmed.chars().any(char::is_control)
    {
        return Err(invalid());
    }
    let all_normal = Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(s) if s != ".."));
    if !all_normal || trimmed.split('/').any(|s| s == "..") {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_rules() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename("my report (final).pdf").is_ok());
        for bad in ["", "  ", "a/b.pdf", "a\\b.pdf", "..", "x..y", "bad\nname"] {
            assert!(validate_filename(bad).is_err(), "{bad:?}");
        }
        assert!(validate_filename(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_relative_path_rules() {
        assert!(validate_relative_path("hr/contracts", "folder").is_ok());
        assert!(validate_relative_path("hr/contracts/offer.pdf", "destination_path").is_ok());
        for bad in ["", "/etc/passwd", "../up", "a/../../b", "a\\b", "./a"] {
            assert!(validate_relative_path(bad, "folder").is_err(), "{bad:?}");
        }
    }
}
