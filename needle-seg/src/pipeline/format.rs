//! 种子点的文本格式.

use crate::consts::handoff::SEED_SIGNIFICANT_DIGITS;
use crate::geometry::Point3;
use itertools::Itertools;

/// 以空格分隔的三个坐标, 每个坐标保留 10 位有效数字.
pub fn format_seed(p: &Point3) -> String {
    p.iter()
        .map(|&v| format_significant(v, SEED_SIGNIFICANT_DIGITS))
        .join(" ")
}

/// 保留 `digits` 位有效数字的最短表示.
///
/// 指数在 `[-4, digits)` 内时使用定点表示, 并至少保留一位小数 (`100.0`);
/// 否则使用指数表示 (`1e+20`, `1.5e-07`). 末尾多余的 0 会被去掉.
/// 非有限值写作 `nan`, `inf` 与 `-inf`.
pub fn format_significant(v: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // 先按科学计数法舍入, 以得到舍入后的真实指数.
    let sci = format!("{:.*e}", digits - 1, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp) as usize;
        let fixed = format!("{v:.decimals$}");
        let trimmed = trim_fraction(&fixed);
        if trimmed.contains('.') {
            trimmed.to_string()
        } else {
            format!("{trimmed}.0")
        }
    }
}

/// 去掉小数部分末尾的 0, 以及随之多余的小数点.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(91.6299, 10), "91.6299");
        assert_eq!(format_significant(100.0, 10), "100.0");
        assert_eq!(format_significant(-27.8934, 10), "-27.8934");
        assert_eq!(format_significant(0.0, 10), "0.0");
        assert_eq!(format_significant(-0.0, 10), "-0.0");
        assert_eq!(format_significant(1.0 / 3.0, 10), "0.3333333333");
        assert_eq!(format_significant(123456.789012345, 10), "123456.789");
        assert_eq!(format_significant(0.0001, 10), "0.0001");
        assert_eq!(format_significant(0.00001, 10), "1e-05");
        assert_eq!(format_significant(1.5e-7, 10), "1.5e-07");
        assert_eq!(format_significant(1e20, 10), "1e+20");
        assert_eq!(format_significant(12345678901.0, 10), "1.23456789e+10");
        // 舍入导致进位.
        assert_eq!(format_significant(9.9999999999, 10), "10.0");
        assert_eq!(format_significant(f64::NAN, 10), "nan");
        assert_eq!(format_significant(f64::INFINITY, 10), "inf");
        assert_eq!(format_significant(f64::NEG_INFINITY, 10), "-inf");
    }

    #[test]
    fn test_format_seed() {
        let p = Point3::new(91.6299, 27.8934, 66.8955);
        assert_eq!(format_seed(&p), "91.6299 27.8934 66.8955");

        let p = Point3::new(-1.0, 0.5, 250.125);
        assert_eq!(format_seed(&p), "-1.0 0.5 250.125");
    }
}
