//! Access control middleware.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's identity headers and checks the caller's role against the [`PermissionTable`] entry for the
//! route's resource and action. If the role is allowed, the caller is stored in the request extensions and the request
//! continues. A request without a usable identity gets a 401, and one whose role is not allowed gets a 403.
//!
//! The table is taken from the app data. When none is registered, the default table is used.
//!
//! Ownership is not checked here. Routes that act on a single order leave that to the engine.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::{debug, warn};
use order_engine::permissions::{Action, PermissionTable, Resource};

use crate::{auth::caller_from_headers, errors::ServerError};

pub struct AclMiddlewareFactory {
    resource: Resource,
    action: Action,
}

impl AclMiddlewareFactory {
    pub fn new(resource: Resource, action: Action) -> Self {
        AclMiddlewareFactory { resource, action }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { resource: self.resource, action: self.action, service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    resource: Resource,
    action: Action,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let (resource, action) = (self.resource, self.action);
        Box::pin(async move {
            let caller = caller_from_headers(req.headers())?;
            let allowed = match req.app_data::<web::Data<PermissionTable>>() {
                Some(table) => table.is_allowed(caller.role, resource, action),
                None => {
                    warn!("💻️ No permission table is registered with the app. Using the default table.");
                    PermissionTable::default().is_allowed(caller.role, resource, action)
                },
            };
            if !allowed {
                debug!("💻️ {} ({}) may not {action} {resource:?}", caller.user_id, caller.role);
                return Err(ServerError::InsufficientPermissions(format!("{} may not {action}", caller.role)).into());
            }
            req.extensions_mut().insert(caller);
            service.call(req).await
        })
    }
}
