// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn styles_returns_styled_when_color_forced() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let debug = format!("{:?}", styles());

    assert_ne!(debug, format!("{:?}", Styles::plain()));
}

#[test]
#[serial]
fn no_color_wins_over_color() {
    std::env::set_var("NO_COLOR", "1");
    std::env::set_var("COLOR", "1");

    assert!(!should_colorize());
    assert_eq!(format!("{:?}", styles()), format!("{:?}", Styles::plain()));
    assert_eq!(header("Step 1"), "Step 1");

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn header_wraps_in_ansi_codes_when_forced() {
    std::env::remove_var("NO_COLOR");
    std::env::set_var("COLOR", "1");

    assert_eq!(header("x"), "\x1b[38;5;74mx\x1b[0m");
    assert_eq!(context("y"), "\x1b[38;5;245my\x1b[0m");

    std::env::remove_var("COLOR");
}
