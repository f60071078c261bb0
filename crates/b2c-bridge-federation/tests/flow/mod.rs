
mod callback_tests;
mod login_tests;
