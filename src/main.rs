#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    hotel_task_manager_lib::run();
}
