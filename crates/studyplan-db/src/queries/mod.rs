pub mod ai_tasks;
pub mod goals;
pub mod manual_tasks;
pub mod students;
