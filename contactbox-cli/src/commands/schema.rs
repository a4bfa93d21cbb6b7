//! Print the table definition

use contactbox_server::db::schema::CREATE_USERS_TABLE;

pub fn run_schema() {
    println!("{}", CREATE_USERS_TABLE.trim());
}
