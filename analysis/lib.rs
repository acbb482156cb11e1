#![deny(dead_code)]
#![deny(non_snake_case)]

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod impute;
pub mod model;
pub mod pipeline;
pub mod predict;
pub mod report;
pub mod sampler;
pub mod split;
pub mod standardize;
