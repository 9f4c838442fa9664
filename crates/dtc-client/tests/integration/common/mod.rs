pub mod mock_dtc;
