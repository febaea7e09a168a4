use actix_web::web;

pub mod routes {
    pub mod search;
}

pub mod services {
    pub mod search;
}

mod dtos {
    pub(crate) mod search;
}

pub fn mount_resources() -> actix_web::Scope {
    web::scope("/resources").service(routes::search::get_resources)
}
