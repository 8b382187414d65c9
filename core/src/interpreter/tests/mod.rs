//! Tests for the workflow interpreter
