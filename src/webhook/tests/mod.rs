//! Unit tests for the webhook bounded context.

mod secret_tests;
