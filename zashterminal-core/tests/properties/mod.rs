mod helpers_tests;
mod highlight_tests;
mod layout_tests;
mod settings_tests;
mod split_tests;
mod tab_tests;
mod tree_tests;
