//! # Noteless
//!
//! Snap a handwritten note, extract its text with OCR, and derive simple
//! movement commands from everything captured so far.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  Intake  │──▶│   OCR    │──▶│ Blob store   │  raw/<id>.png
//! │ (base64) │   │ Tess/Rek │   │ FS / S3      │
//! └──────────┘   └──────────┘   └──────────────┘
//!                      │        ┌──────────────┐
//!                      └───────▶│ Record store │  <id> → detections
//!                               │ SQLite       │
//!                               └──────┬───────┘
//!                                      ▼
//!                 ┌──────────┐   ┌──────────┐
//!                 │   CLI    │   │   HTTP   │  /rules /notes /commands
//!                 └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! noteless init                     # create database and blob root
//! noteless intake ./snap.png        # OCR a note and store it
//! noteless commands                 # commands found so far
//! noteless serve                    # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`intake`] | Intake pipeline |
//! | [`listing`] | Rule text, thumbnails and command listing |
//! | [`audit`] | Orphan blob / record report |
//! | [`server`] | HTTP server |
//! | [`services`] | Collaborator wiring from config |
//! | [`blob_fs`] / [`blob_s3`] | Blob stores |
//! | [`sqlite_store`] | SQLite record store |
//! | [`ocr_tesseract`] / [`ocr_rekognition`] | OCR adapters |
//! | [`sigv4`] | AWS request signing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logging`] | Tracing subscriber setup |

pub mod audit;
pub mod blob_fs;
pub mod blob_s3;
pub mod config;
pub mod db;
pub mod intake;
pub mod listing;
pub mod logging;
pub mod migrate;
pub mod ocr_rekognition;
pub mod ocr_tesseract;
pub mod server;
pub mod services;
pub mod sigv4;
pub mod sqlite_store;
