// Domain layer: canonical facsimile model and the ports external collaborators implement.

pub mod model;
pub mod ports;
