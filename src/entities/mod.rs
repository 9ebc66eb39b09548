pub mod application;
pub mod company;
pub mod job;
pub mod user;

pub use application::Entity as Applications;
pub use company::Entity as Companies;
pub use job::Entity as Jobs;
pub use user::Entity as Users;
