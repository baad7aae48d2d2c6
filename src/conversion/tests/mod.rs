//! Unit tests for the conversion bounded context.

mod upload_tests;
