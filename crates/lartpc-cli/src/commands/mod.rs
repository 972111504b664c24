pub mod fire;
pub mod materials;
pub mod scan;
