pub mod mock_env;
