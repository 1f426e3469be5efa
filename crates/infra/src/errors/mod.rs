//! Infrastructure error conversions

mod conversions;
