pub mod calibration;
pub mod color;
pub mod descriptor;
pub mod expression;
pub mod introspect;
pub mod manifest;
pub mod mtn;
pub mod offset;
pub mod opacity;
pub mod paths;
pub mod reconcile;
