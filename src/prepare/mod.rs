pub mod data_preparer;
