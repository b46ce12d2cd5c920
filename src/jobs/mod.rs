pub mod daily_attendance;
