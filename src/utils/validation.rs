use crate::utils::error::{AuditError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> AuditError {
    AuditError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 只接受帶主機名稱的 http(s) 網址，回傳解析結果
pub fn validate_url(field_name: &str, url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str.trim())
        .map_err(|e| invalid(field_name, url_str, format!("not a valid URL ({})", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("scheme '{}' is not http or https", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field_name, url_str, "URL has no host"));
    }
    Ok(url)
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    match path {
        "" => Err(invalid(field_name, path, "path is empty")),
        p if p.contains('\0') => Err(invalid(
            field_name,
            path.escape_debug(),
            "path contains a NUL byte",
        )),
        _ => Ok(()),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "value is empty or whitespace-only"));
    }
    Ok(())
}

/// 確認 `min <= max`，NaN 視為不合法
pub fn validate_bounds<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    min: T,
    max: T,
) -> Result<()> {
    if !(min <= max) {
        return Err(invalid(
            field_name,
            format!("{}..{}", min, max),
            format!("lower bound {} exceeds upper bound {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_in_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}
