pub mod db;
pub mod userdb;
pub mod ledgerdb;
pub mod escrowdb;
pub mod projectdb;
pub mod workdb;
pub mod withdrawaldb;
pub mod subscriptiondb;
pub mod orderdb;
pub mod notificationdb;
