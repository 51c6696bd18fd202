use crate::gnss::{Angle, Fix};

/// Last known GNSS position information.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocationModel {
    pub fix: Option<Fix>,
}

impl LocationModel {
    pub fn latitude(&self) -> Option<Angle> {
        self.fix.as_ref().and_then(Fix::latitude)
    }

    pub fn longitude(&self) -> Option<Angle> {
        self.fix.as_ref().and_then(Fix::longitude)
    }
}
