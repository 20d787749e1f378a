/// Reductions whose conventional spelling differs from the reduced fraction.
const ASPECT_EDGE_CASES: [(&str, &str); 4] = [
    ("8:5", "16:10"),
    ("5:8", "10:16"),
    ("7:3", "21:9"),
    ("3:7", "9:21"),
];

fn greatest_common_divisor(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn reduce_ratio(width: u64, height: u64) -> String {
    let gcd = greatest_common_divisor(width, height).max(1);
    let reduced = format!("{}:{}", width / gcd, height / gcd);
    ASPECT_EDGE_CASES
        .iter()
        .find(|(from, _)| *from == reduced)
        .map(|(_, to)| to.to_string())
        .unwrap_or(reduced)
}

/// First `m:n` with `n <= 20` within 0.01 of `aspect`, else the plain number.
pub(crate) fn aspect_ratio(aspect: f64) -> String {
    for n in 1..=20u64 {
        let m = (aspect * n as f64 + 0.5) as u64;
        if (aspect - m as f64 / n as f64).abs() < 0.01 {
            return reduce_ratio(m, n);
        }
    }
    format!("{:.6}", aspect)
}

/// Aspect ratio implied by the two screen size bytes of the base record.
///
/// A zero horizontal size encodes a portrait ratio in the vertical byte,
/// a zero vertical size a landscape ratio in the horizontal byte.
pub(crate) fn screen_aspect_ratio(h_size: u8, v_size: u8) -> String {
    match (h_size, v_size) {
        (0, 0) => "undefined".to_string(),
        (0, v) => aspect_ratio(100.0 / (v as f64 + 99.0)),
        (h, 0) => aspect_ratio((h as f64 + 99.0) / 100.0),
        (h, v) => aspect_ratio(h as f64 / v as f64),
    }
}

/// Three letters packed as 5-bit codes, `1` being `A`.
pub(crate) fn manufacturer_letters(code: u64) -> String {
    [code >> 10 & 0x1f, code >> 5 & 0x1f, code & 0x1f]
        .iter()
        .map(|&c| char::from(64 + c as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_sizes() {
        assert_eq!(screen_aspect_ratio(0, 0), "undefined");
        assert_eq!(screen_aspect_ratio(160, 90), "16:9");
        assert_eq!(screen_aspect_ratio(52, 32), "13:8");
        assert_eq!(screen_aspect_ratio(34, 27), "5:4");
    }

    #[test]
    fn test_edge_cases_apply_after_reduction() {
        // 48 / 30 is found as 8:5 and only then renamed
        assert_eq!(screen_aspect_ratio(48, 30), "16:10");
        // landscape: (61 + 99) / 100 = 1.6
        assert_eq!(screen_aspect_ratio(61, 0), "16:10");
        // portrait: 100 / (61 + 99) = 0.625
        assert_eq!(screen_aspect_ratio(0, 61), "10:16");
        assert_eq!(screen_aspect_ratio(70, 30), "21:9");
        assert_eq!(screen_aspect_ratio(30, 70), "9:21");
    }

    #[test]
    fn test_landscape_search_picks_first_denominator() {
        // 1.77 is first within tolerance at n = 9
        assert_eq!(screen_aspect_ratio(78, 0), "16:9");
    }

    #[test]
    fn test_no_ratio_within_tolerance() {
        assert_eq!(aspect_ratio(1.025), "1.025000");
    }

    #[test]
    fn test_manufacturer_letters() {
        assert_eq!(manufacturer_letters(0x10ac), "DEL");
        assert_eq!(manufacturer_letters(0x4341), "PZA");
        assert_eq!(manufacturer_letters(0x4c2d), "SAM");
    }
}
