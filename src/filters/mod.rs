pub mod lowpass;
pub mod outlier;
pub mod rate_kf;
pub mod unwrap;

pub use lowpass::Smoother;
pub use outlier::OutlierCorrector;
pub use rate_kf::{RateEstimate, RateEstimator};
pub use unwrap::{smallest_signed_angle_between, AngleUnwrapper};
