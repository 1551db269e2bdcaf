mod config_backup_tests;
mod highlight_override_tests;
mod layout_restore_tests;
mod session_workflow_tests;
