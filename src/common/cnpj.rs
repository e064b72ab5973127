// src/common/cnpj.rs

use crate::common::error::AppError;

pub const CNPJ_DIGITS: usize = 14;

pub fn only_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// "12.345.678/0001-90" -> "12345678000190".
/// Rejeita localmente, antes de qualquer chamada à API, o que não tiver 14 dígitos.
pub fn normalize_cnpj(raw: &str) -> Result<String, AppError> {
    let digits = only_digits(raw);
    if digits.len() != CNPJ_DIGITS {
        return Err(AppError::invalid("Informe um CNPJ válido com 14 dígitos."));
    }
    Ok(digits)
}

/// Máscara ##.###.###/####-## aplicada ao que já foi digitado.
pub fn format_cnpj(raw: &str) -> String {
    let digits: Vec<char> = only_digits(raw).chars().take(CNPJ_DIGITS).collect();
    let mut out = String::with_capacity(18);
    for (i, d) in digits.iter().enumerate() {
        match i {
            2 | 5 => out.push('.'),
            8 => out.push('/'),
            12 => out.push('-'),
            _ => {}
        }
        out.push(*d);
    }
    out
}
