/// Rocket environment, managed so routes can tell production apart.
pub struct Environment(pub rocket::config::Environment);
