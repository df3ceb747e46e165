use super::test_helpers::*;
use crate::error::{Error, JobError};
use crate::extractor::ExtractionProfile;
use crate::types::{Event, JobId, JobState};
use std::sync::atomic::Ordering;
use std::time::Duration;
