use coursegate_config::Settings;
use coursegate_services::{
    AccessService, AuthService, MongoAccessStore,
    dao::{course::CourseDao, user::UserDao},
};
use mongodb::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub courses: Arc<CourseDao>,
    pub access: Arc<AccessService>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let courses = Arc::new(CourseDao::new(&db));
        let access = Arc::new(AccessService::new(
            Arc::new(MongoAccessStore::new(&db)),
            settings.access.clone(),
        ));

        Self {
            db,
            settings,
            auth,
            users,
            courses,
            access,
        }
    }
}
