use serde::Serialize;

/// Where a timing mode was advertised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    Established,
    Standard,
    Detailed,
    DisplayId,
}

/// A display mode reduced to what every timing encoding can express.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingMode {
    pub width: u32,
    pub height: u32,
    pub refresh_hz: f64,
    pub interlaced: bool,
    pub source: TimingSource,
}

impl TimingMode {
    /// Parse labels of the form `1024x768@87Hz(I)`; reserved entries yield `None`.
    pub fn from_label(label: &str, source: TimingSource) -> Option<Self> {
        let (size, rest) = label.split_once('@')?;
        let (w, h) = size.split_once('x')?;
        let (rate, flags) = rest.split_once("Hz")?;
        Some(TimingMode {
            width: w.parse().ok()?,
            height: h.parse().ok()?,
            refresh_hz: rate.parse().ok()?,
            interlaced: flags == "(I)",
            source,
        })
    }

    /// Mode of a standard timing slot: height follows from the aspect code.
    pub fn from_standard(width: u32, aspect: u64, refresh_hz: u32) -> Self {
        let height = match aspect {
            0 => width * 10 / 16,
            1 => width * 3 / 4,
            2 => width * 4 / 5,
            _ => width * 9 / 16,
        };
        TimingMode {
            width,
            height,
            refresh_hz: refresh_hz as f64,
            interlaced: false,
            source: TimingSource::Standard,
        }
    }

    /// Mode of a full timing description; `pixel_clock_hz / (h_total * v_total)`.
    pub fn from_totals(
        width: u64,
        height: u64,
        h_total: u64,
        v_total: u64,
        pixel_clock_hz: u64,
        interlaced: bool,
        source: TimingSource,
    ) -> Self {
        let pixels = h_total * v_total;
        let refresh_hz = if pixels == 0 {
            0.0
        } else {
            pixel_clock_hz as f64 / pixels as f64
        };
        TimingMode {
            width: width as u32,
            height: height as u32,
            refresh_hz,
            interlaced,
            source,
        }
    }
}

impl std::fmt::Display for TimingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@{:.2}Hz", self.width, self.height, self.refresh_hz)?;
        if self.interlaced {
            write!(f, " interlaced")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let m = TimingMode::from_label("1024x768@87Hz(I)", TimingSource::Established).unwrap();
        assert_eq!((m.width, m.height, m.refresh_hz, m.interlaced), (1024, 768, 87.0, true));
        let rb = TimingMode::from_label("1920x1200@60Hz(RB)", TimingSource::Established).unwrap();
        assert!(!rb.interlaced);
        assert!(TimingMode::from_label("reserved", TimingSource::Established).is_none());
    }

    #[test]
    fn test_standard_heights() {
        assert_eq!(TimingMode::from_standard(1920, 3, 60).height, 1080);
        assert_eq!(TimingMode::from_standard(1280, 2, 60).height, 1024);
        assert_eq!(TimingMode::from_standard(1680, 0, 60).height, 1050);
        assert_eq!(TimingMode::from_standard(1024, 1, 75).height, 768);
    }

    #[test]
    fn test_refresh_from_totals() {
        let m = TimingMode::from_totals(1920, 1080, 2200, 1125, 148_500_000, false, TimingSource::Detailed);
        assert!((m.refresh_hz - 60.0).abs() < 1e-9);
    }
}
