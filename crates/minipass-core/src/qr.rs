//! QR code generation for pass check-in

use qrcode::render::svg;
use qrcode::QrCode;

use crate::error::{Error, Result};

/// The redemption URL encoded in a pass QR code
pub fn redeem_url(base_url: &str, pass_code: &str) -> String {
    format!("{}/pass/{}", base_url.trim_end_matches('/'), pass_code)
}

/// Render a pass QR code as an SVG document
///
/// SVG keeps emails small and scales cleanly on the door scanner.
pub fn pass_qr_svg(base_url: &str, pass_code: &str) -> Result<String> {
    let url = redeem_url(base_url, pass_code);
    let code = QrCode::new(url.as_bytes()).map_err(|e| Error::Qr(e.to_string()))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_url_trailing_slash() {
        assert_eq!(
            redeem_url("https://pass.example.com/", "ABCD1234"),
            "https://pass.example.com/pass/ABCD1234"
        );
    }

    #[test]
    fn test_svg_output() {
        let svg = pass_qr_svg("http://localhost:8080", "ABCD1234ABCD1234").unwrap();
        assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
        assert!(svg.contains("svg"));
    }
}
