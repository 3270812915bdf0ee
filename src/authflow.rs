use {
    super::{
        config::Config,
        date_helpers::relative_to_absolute,
        roster::{EventState, RosterStore},
    },
    argon2::{
        password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
        Algorithm, Argon2, Params, Version,
    },
    chrono::Utc,
    jwt::{SignWithKey, VerifyWithKey},
    lettre::Address,
    rocket::{
        form::{Form, Lenient, Strict},
        http::{Cookie, CookieJar, SameSite, Status},
        request::{FlashMessage, FromRequest, Outcome, Request},
        response::{Flash, Redirect},
        State,
    },
    rocket_dyn_templates::{context, Template},
    serde::{Deserialize, Serialize},
    std::time::Duration,
    thiserror::Error,
};

/// What a staff member may do once signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    EventOrganizer,
    EventStaff,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::EventOrganizer => "Event Organizer",
            Self::EventStaff => "Event Staff",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Administrator" => Some(Self::Administrator),
            "Event Organizer" => Some(Self::EventOrganizer),
            "Event Staff" => Some(Self::EventStaff),
            _ => None,
        }
    }

    /// Whether this role may manage the roster and generate codes.
    #[must_use]
    pub fn is_manager(self) -> bool {
        matches!(self, Self::Administrator | Self::EventOrganizer)
    }
}

/// A seeded staff login. The password is stored hashed only.
#[derive(Debug, Clone)]
pub struct StaffAccount {
    pub email: Address,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
}

// Constructs an [`argon2::Argon2`] instance with reasonable settings.
fn construct_argon2_instance() -> Argon2<'static> {
    Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(15_u32 * 1024_u32, 2, 1, None).unwrap(),
    )
}

/// Hashes a staff password for the seeded directory.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(rand::thread_rng());
    construct_argon2_instance()
        .hash_password(password.as_bytes(), &salt)
        .expect("Could not hash password!")
        .to_string()
}

/// Verifies a submitted password against a stored hash.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    construct_argon2_instance()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn search_staff<'state>(state: &'state EventState, email: &str) -> Option<&'state StaffAccount> {
    state
        .staff
        .iter()
        .find(|account| account.email.to_string().eq_ignore_ascii_case(email))
}

/// The display name the header shows for a signed-in staff email.
#[must_use]
pub fn staff_display_name(state: &EventState, email: &str) -> Option<String> {
    search_staff(state, email).map(|account| account.display_name.clone())
}

#[derive(FromForm)]
pub struct LoginForm {
    email: String,
    password: String,
    remember: Lenient<bool>,
}

#[get("/", rank = 2)]
pub fn index(flash: Option<FlashMessage<'_>>) -> Template {
    Template::render(
        "login",
        context! {
            flash: flash.map(|flash| flash.message().to_string()),
        },
    )
}

/// A shorthand for bouncing a failed login back to the form.
#[inline]
fn login_failure(message: &str) -> Flash<Redirect> {
    Flash::error(Redirect::to(uri!(index)), message)
}

#[post("/", data = "<login_details>")]
pub fn login(
    store: &State<RosterStore>,
    config: &State<Config>,
    jar: &CookieJar<'_>,
    mut login_details: Form<Strict<LoginForm>>,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    // strip and normalize a bit
    login_details.email = login_details.email.trim().to_lowercase();

    if login_details.email.parse::<Address>().is_err() {
        return Err(login_failure("Please enter a valid email address."));
    }
    if login_details.password.len() < 6 {
        return Err(login_failure("Password must be at least 6 characters."));
    }

    let account = store.read(|state| {
        search_staff(state, &login_details.email).map(|account| {
            (
                account.display_name.clone(),
                account.role,
                account.password_hash.clone(),
            )
        })
    });
    let Some((display_name, role, password_hash)) = account else {
        return Err(login_failure(
            "Invalid credentials. Please check your email and password.",
        ));
    };
    if !verify_password(&login_details.password, &password_hash) {
        return Err(login_failure(
            "Invalid credentials. Please check your email and password.",
        ));
    }

    let session = Duration::from_secs(60 * 60 * 24 * config.session_days);
    let claims = Claims {
        exp: relative_to_absolute(session),
        sub: login_details.email.clone(),
        role: role.as_str().to_string(),
    };
    let token = claims.sign_with_key(&config.jwt_key).unwrap();

    let mut cookie = Cookie::build(("auth-token", token)).same_site(SameSite::Lax);
    if *login_details.remember {
        // "remember me" survives the browser session, a plain login doesn't
        cookie = cookie.max_age(time::Duration::days(config.session_days as i64));
    }
    jar.add(cookie);

    Ok(Flash::success(
        Redirect::to(uri!(super::dashboard(event = _))),
        format!("Signed in as {display_name}."),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    exp: i64,
    sub: String,
    role: String,
}

impl Claims {
    fn expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    fn try_from_request(req: &Request<'_>) -> Result<Self, AuthError> {
        let config = req
            .rocket()
            .state::<Config>()
            .expect("Config is not set in main!");
        let cookies = req.cookies();
        let claims: Claims = cookies
            .get("auth-token")
            .ok_or(AuthError::CookieNotFound)?
            .value()
            .verify_with_key(&config.jwt_key)?;

        if claims.expired() {
            cookies.remove("auth-token");
            return Err(AuthError::JwtExpired);
        }

        Ok(claims)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT cookie doesn't exist")]
    CookieNotFound,
    #[error("JWT verification error")]
    JwtVerificationError(#[from] jwt::error::Error),
    #[error("JWT cookie expired")]
    JwtExpired,
    #[error("No permission for the wanted role")]
    NoPermission,
    #[error("Staff account doesn't exist")]
    NonExistentStaff,
}

/// Any signed-in staff member. You can be ensured a session is valid when you have this
/// in scope.
pub struct User {
    email: String,
    role: Role,
}

impl User {
    fn from_request_result(req: &Request<'_>) -> Result<Self, AuthError> {
        let claims = Claims::try_from_request(req)?;
        let role = Role::parse(&claims.role).ok_or(AuthError::NoPermission)?;
        Ok(User {
            email: claims.sub,
            role,
        })
    }

    #[inline]
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match Self::from_request_result(req) {
            Ok(user) => Outcome::Success(user),
            Err(_) => Outcome::Forward(Status::Unauthorized),
        }
    }
}

/// A signed-in administrator or event organizer.
///
/// A manager may edit the roster, run bulk actions and generate QR codes; plain event
/// staff only operate the check-in station.
pub struct Manager {
    _email: String,
}

impl Manager {
    fn from_request_result(req: &Request<'_>) -> Result<Self, AuthError> {
        let claims = Claims::try_from_request(req)?;
        let claimed_role = Role::parse(&claims.role).ok_or(AuthError::NoPermission)?;

        // might seem unneeded, but an account could have been demoted after the JWT was
        // issued; the claims flag alone isn't trustworthy
        let store = req
            .rocket()
            .state::<RosterStore>()
            .expect("RosterStore is not managed in main!");
        let current_role = store.read(|state| {
            search_staff(state, &claims.sub)
                .map(|account| account.role)
                .ok_or(AuthError::NonExistentStaff)
        })?;

        if !claimed_role.is_manager() || !current_role.is_manager() {
            return Err(AuthError::NoPermission);
        }

        Ok(Manager { _email: claims.sub })
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for Manager {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match Self::from_request_result(req) {
            Ok(manager) => Outcome::Success(manager),
            Err(err) => {
                log::info!("Rejecting manager-only request: {}", err);
                Outcome::Forward(Status::Unauthorized)
            }
        }
    }
}
