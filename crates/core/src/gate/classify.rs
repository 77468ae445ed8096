//! Ordered gate checks.

use std::sync::Arc;
use tracing::{debug, info};

use crate::unit::{InstrumentFamily, RejectionReason, UnitClass, WorkUnit};

use super::traits::UnitInspector;
use super::types::{GateVerdict, HeaderKeywords};

/// Classifies units or rejects them with a named reason.
///
/// Checks run in a fixed order and the first failing one decides the
/// verdict.
pub struct QualityGate {
    inspector: Arc<dyn UnitInspector>,
}

impl QualityGate {
    pub fn new(inspector: Arc<dyn UnitInspector>) -> Self {
        Self { inspector }
    }

    pub async fn classify(&self, unit: &WorkUnit) -> Result<UnitClass, GateVerdict> {
        if self.inspector.is_multi_component(unit).await? {
            return Err(reject(unit, RejectionReason::MultiComponent));
        }

        // Listing errors read the same as no file.
        let aux = self.inspector.aux_files(unit).await.unwrap_or_default();
        let path = match aux.as_slice() {
            [] => return Err(reject(unit, RejectionReason::MissingAuxFile)),
            [path] => path,
            many => {
                return Err(reject(
                    unit,
                    RejectionReason::AmbiguousAuxFile { count: many.len() },
                ))
            }
        };

        let header = match self.inspector.read_header(path).await {
            Ok(header) => header,
            Err(e) => {
                debug!("Header of {} unreadable: {}", path.display(), e);
                return Err(reject(unit, RejectionReason::UnreadableMetadata));
            }
        };

        let class = check_header(&header).map_err(|reason| reject(unit, reason))?;
        info!("Unit {} classified as {}", unit.id, class.family);
        Ok(class)
    }
}

fn reject(unit: &WorkUnit, reason: RejectionReason) -> GateVerdict {
    info!("Skipping {}: {}", unit.id, reason);
    GateVerdict::Rejected(reason)
}

/// Applies the keyword checks to an already-read header.
pub fn check_header(header: &HeaderKeywords) -> Result<UnitClass, RejectionReason> {
    if header.get_str("OBS_MODE") != Some("POINTING") {
        return Err(RejectionReason::WrongObservingMode);
    }
    if header.get_str("GRATING") != Some("NONE") {
        return Err(RejectionReason::DispersiveElement);
    }

    let instrument = header.get_str("INSTRUME");
    if instrument == Some("ACIS") {
        if header.get_str("READMODE") != Some("TIMED") {
            return Err(RejectionReason::ReadoutMode);
        }
        if header.get_f64("DTYCYCLE") != Some(0.0) {
            return Err(RejectionReason::InterleavedClocking);
        }
    }

    let family = if instrument == Some("HRC") {
        InstrumentFamily::Hrc
    } else {
        InstrumentFamily::Acis
    };
    Ok(UnitClass::new(family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::HeaderValue;

    fn s(v: &str) -> HeaderValue {
        HeaderValue::Str(v.to_string())
    }

    fn nominal_acis() -> HeaderKeywords {
        HeaderKeywords::new()
            .with("OBS_MODE", s("POINTING"))
            .with("GRATING", s("NONE"))
            .with("INSTRUME", s("ACIS"))
            .with("READMODE", s("TIMED"))
            .with("DTYCYCLE", HeaderValue::Int(0))
    }

    #[test]
    fn test_nominal_acis_passes() {
        let class = check_header(&nominal_acis()).unwrap();
        assert_eq!(class.family, InstrumentFamily::Acis);
    }

    #[test]
    fn test_hrc_skips_acis_only_checks() {
        let header = HeaderKeywords::new()
            .with("OBS_MODE", s("POINTING"))
            .with("GRATING", s("NONE"))
            .with("INSTRUME", s("HRC"))
            .with("READMODE", s("CONTINUOUS"));
        let class = check_header(&header).unwrap();
        assert_eq!(class.family, InstrumentFamily::Hrc);
    }

    #[test]
    fn test_observing_mode_checked_before_grating() {
        let header = nominal_acis()
            .with("OBS_MODE", s("SLEW"))
            .with("GRATING", s("HETG"));
        assert_eq!(
            check_header(&header),
            Err(RejectionReason::WrongObservingMode)
        );
    }

    #[test]
    fn test_grating_checked_before_readout() {
        let header = nominal_acis()
            .with("GRATING", s("LETG"))
            .with("READMODE", s("CONTINUOUS"));
        assert_eq!(
            check_header(&header),
            Err(RejectionReason::DispersiveElement)
        );
    }

    #[test]
    fn test_readout_checked_before_clocking() {
        let header = nominal_acis()
            .with("READMODE", s("CONTINUOUS"))
            .with("DTYCYCLE", HeaderValue::Int(5));
        assert_eq!(check_header(&header), Err(RejectionReason::ReadoutMode));
    }

    #[test]
    fn test_interleaved_clocking() {
        let header = nominal_acis().with("DTYCYCLE", HeaderValue::Int(5));
        assert_eq!(
            check_header(&header),
            Err(RejectionReason::InterleavedClocking)
        );
    }

    #[test]
    fn test_missing_keywords_reject() {
        assert_eq!(
            check_header(&HeaderKeywords::new()),
            Err(RejectionReason::WrongObservingMode)
        );
        let no_cycle = HeaderKeywords::new()
            .with("OBS_MODE", s("POINTING"))
            .with("GRATING", s("NONE"))
            .with("INSTRUME", s("ACIS"))
            .with("READMODE", s("TIMED"));
        assert_eq!(
            check_header(&no_cycle),
            Err(RejectionReason::InterleavedClocking)
        );
    }
}
