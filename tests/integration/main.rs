//! Integration tests for the TICKERBOARD data layer.

mod mock_transport;
mod sorting;
