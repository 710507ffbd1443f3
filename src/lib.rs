//! MindMirror - video check-in capture and analysis CLI
//!
//! This crate records a short, bounded video check-in from the camera and
//! microphone (or accepts an existing MP4 file), converts it to a broadly
//! playable format, and submits it to an analysis service that returns a
//! wellness report.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Core business logic, value objects, entities, and errors
//! - **Application**: Use cases and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (FFmpeg, HTTP, config storage)
//! - **CLI**: Command-line interface, argument parsing, and output formatting

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
