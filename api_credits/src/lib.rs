use actix_web::web::{self};

pub mod routes {
    pub mod billing;
    pub mod credits;
}

pub mod services {
    pub mod billing;
    pub mod ledger;
}

mod dtos {
    pub(crate) mod credits;
}

mod misc {
    pub(crate) mod billing;
}

pub fn mount_credits() -> actix_web::Scope {
    web::scope("/credits")
        .service(routes::credits::get_credits)
        .service(routes::credits::post_consume)
}
pub fn mount_billing() -> actix_web::Scope {
    web::scope("/billing").service(routes::billing::post_webhook)
}
