// Internal shared utilities for the Tabula library

pub mod error;
