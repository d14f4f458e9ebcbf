//! Desktop client that sends ZIP archives (one workbook each) to a merge
//! service and saves the merged workbook it returns.

pub mod app;
pub mod config;
pub mod download;
pub mod logging;
pub mod upload;
pub mod utils;
