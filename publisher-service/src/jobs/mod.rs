pub mod scheduled_publisher;
