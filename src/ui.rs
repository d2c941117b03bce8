mod admin;
mod detail;
mod list;

use std::rc::Rc;

use leptos::ev;
use leptos::leptos_dom::helpers::{document, set_timeout, window, window_event_listener};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route as PathRoute, Router, Routes},
    path,
};
use log::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};

use crate::app::{BrowserApp, PollDetail};
use crate::chart::{should_show_results, ResultsSlot};
use crate::export::{EXPORT_FILE_NAME, EXPORT_MIME};
use crate::poll::{Debounce, SearchTicket, SortKey};
use crate::router::{Navigation, Route, Visit};
use crate::{Error, Poll};

use admin::{CreatePollForm, LoginForm};
use detail::PollDetailView;
use list::PollList;

/// Browser entry point: panic hook, console logging, then hydration.
#[cfg(feature = "hydrate")]
pub fn start() {
    console_error_panic_hook::set_once();
    crate::logging::init(log::LevelFilter::Info);
    leptos::mount::hydrate_body(App);
}

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
                <meta name="color-scheme" content="dark light"/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

/// What the main area currently shows.
#[derive(Debug, Clone, PartialEq)]
enum Screen {
    Loading,
    List(Vec<Poll>),
    Detail(PollDetail),
    Failed(String),
    Login,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Toast {
    id: u64,
    kind: ToastKind,
    message: String,
}

/// Keeps the loading overlay up while alive.
struct LoadingGuard(RwSignal<u32>);

impl LoadingGuard {
    fn new(busy: RwSignal<u32>) -> Self {
        busy.update(|n| *n += 1);
        Self(busy)
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.try_update(|n| *n = n.saturating_sub(1));
    }
}

/// Handles shared by every component. All fields are arena handles, so this is `Copy`.
#[derive(Clone, Copy)]
struct Ctx {
    app: StoredValue<Rc<BrowserApp>, LocalStorage>,
    screen: RwSignal<Screen>,
    chart: RwSignal<ResultsSlot>,
    sort: RwSignal<SortKey>,
    search: RwSignal<String>,
    debounce: StoredValue<Debounce>,
    nav: StoredValue<Navigation>,
    busy: RwSignal<u32>,
    toasts: RwSignal<Vec<Toast>>,
    next_toast: StoredValue<u64>,
}

impl Ctx {
    fn new() -> Self {
        Self {
            app: StoredValue::new_local(Rc::new(BrowserApp::browser())),
            screen: RwSignal::new(Screen::Loading),
            chart: RwSignal::new(ResultsSlot::default()),
            sort: RwSignal::new(SortKey::default()),
            search: RwSignal::new(String::new()),
            debounce: StoredValue::new(Debounce::default()),
            nav: StoredValue::new(Navigation::default()),
            busy: RwSignal::new(0),
            toasts: RwSignal::new(Vec::new()),
            next_toast: StoredValue::new(0),
        }
    }

    fn app(&self) -> Rc<BrowserApp> {
        self.app.get_value()
    }

    fn loading(&self) -> LoadingGuard {
        LoadingGuard::new(self.busy)
    }

    fn toast(&self, kind: ToastKind, message: impl Into<String>) {
        self.next_toast.update_value(|n| *n += 1);
        let id = self.next_toast.get_value();
        self.toasts.update(|toasts| {
            toasts.push(Toast {
                id,
                kind,
                message: message.into(),
            })
        });

        let toasts = self.toasts;
        set_timeout(
            move || {
                toasts.try_update(|toasts| toasts.retain(|t| t.id != id));
            },
            self.app().config().toast_lifetime,
        );
    }

    fn dismiss(&self, id: u64) {
        self.toasts.update(|toasts| toasts.retain(|t| t.id != id));
    }

    /// Shows `err`, optionally prefixed. Local rejections are shown as-is.
    fn report(&self, prefix: &str, err: &Error) {
        warn!("{prefix}{err}");
        let kind = if err.is_informational() {
            ToastKind::Info
        } else {
            ToastKind::Error
        };
        let message = match err {
            Error::Validation(_) => err.to_string(),
            _ => format!("{prefix}{err}"),
        };
        self.toast(kind, message);
    }

    /// Routes to `route`; re-dispatches directly when the fragment is already there.
    fn navigate(&self, route: Route) {
        if current_route() == route {
            self.dispatch(route);
        } else if let Err(e) = window().location().set_hash(&route.fragment()) {
            warn!("Failed to set location hash: {e:?}");
            self.dispatch(route);
        }
    }

    fn dispatch(&self, route: Route) {
        debug!("Routing to {route:?}");
        let visit = self.nav.try_update_value(|nav| nav.begin(route));
        let Some(visit) = visit else {
            return;
        };
        match visit.route().clone() {
            Route::List => self.load_list(visit),
            Route::Detail(id) => self.load_detail(visit, id),
        }
    }

    /// False once the user has navigated away from `visit`.
    fn is_current(&self, visit: &Visit) -> bool {
        self.nav
            .try_with_value(|nav| nav.is_current(visit))
            .unwrap_or(false)
    }

    fn load_list(&self, visit: Visit) {
        self.chart.update(|slot| slot.clear());
        self.run_search(visit);
    }

    /// Fetches the list filtered by the live search input.
    ///
    /// Results for an input that has changed in the meantime, or that land
    /// after the user left the list, are dropped.
    fn run_search(&self, visit: Visit) {
        let ctx = *self;
        let ticket = SearchTicket::new(self.search.get_untracked());
        spawn_local(async move {
            let _loading = ctx.loading();
            let (ticket, result) = ctx.app().search(ticket, ctx.sort.get_untracked()).await;
            if !ctx.is_current(&visit) {
                debug!("Dropping list results for a superseded visit");
                return;
            }
            if !ticket.is_current(&ctx.search.get_untracked()) {
                debug!("Dropping stale results for {:?}", ticket.term());
                return;
            }
            match result {
                Ok(polls) => ctx.screen.set(Screen::List(polls)),
                Err(e) => {
                    ctx.report("Failed to load polls. ", &e);
                    ctx.screen
                        .set(Screen::Failed("Error loading polls. Please try again.".into()));
                }
            }
        });
    }

    /// Searches once typing has paused for the debounce delay.
    fn schedule_search(&self, term: String) {
        self.search.set(term);
        let Some(token) = self.debounce.try_update_value(|d| d.arm()) else {
            return;
        };
        let ctx = *self;
        set_timeout(
            move || {
                if ctx.debounce.try_with_value(|d| d.fires(token)) == Some(true) {
                    ctx.navigate(Route::List);
                }
            },
            self.app().config().search_debounce,
        );
    }

    fn load_detail(&self, visit: Visit, id: String) {
        let ctx = *self;
        spawn_local(async move {
            let _loading = ctx.loading();
            let result = ctx.app().poll_detail(&id).await;
            if !ctx.is_current(&visit) {
                debug!("Dropping poll {id} for a superseded visit");
                return;
            }
            match result {
                Ok(detail) => ctx.show_detail(detail),
                Err(e) => {
                    ctx.report("", &e);
                    ctx.chart.update(|slot| slot.clear());
                    ctx.screen
                        .set(Screen::Failed("Error loading poll details.".into()));
                    ctx.redirect_to_list_from(visit);
                }
            }
        });
    }

    fn redirect_to_list_from(&self, failed: Visit) {
        let ctx = *self;
        set_timeout(
            move || {
                let fragment = window().location().hash().unwrap_or_default();
                let target = ctx
                    .nav
                    .try_with_value(|nav| nav.redirect_after_failure(&failed, &fragment))
                    .flatten();
                if let Some(route) = target {
                    ctx.navigate(route);
                }
            },
            self.app().config().redirect_delay,
        );
    }

    /// Applies the outcome of a vote if its poll is still on screen.
    fn show_vote(&self, poll_id: String, refreshed: Option<PollDetail>) {
        let route = Route::Detail(poll_id);
        if current_route() != route {
            return;
        }
        match refreshed {
            Some(detail) => self.show_detail(detail),
            None => self.dispatch(route),
        }
    }

    fn show_detail(&self, detail: PollDetail) {
        self.chart.update(|slot| {
            if should_show_results(&detail.poll, detail.has_voted) {
                slot.show(&detail.poll);
            } else {
                slot.clear();
            }
        });
        self.screen.set(Screen::Detail(detail));
    }

    fn open_create(&self) {
        // pending list or detail loads must not replace the form
        self.nav.update_value(|nav| {
            nav.begin(current_route());
        });
        self.chart.update(|slot| slot.clear());
        if self.app().is_admin() {
            self.screen.set(Screen::Create);
        } else {
            self.screen.set(Screen::Login);
            self.toast(ToastKind::Info, "Please login as admin to create polls.");
        }
    }

    fn export(&self) {
        let ctx = *self;
        spawn_local(async move {
            let _loading = ctx.loading();
            match ctx.app().export_csv().await {
                Ok(None) => ctx.toast(ToastKind::Info, "No polls to export."),
                Ok(Some(csv)) => match download(EXPORT_FILE_NAME, EXPORT_MIME, &csv) {
                    Ok(()) => ctx.toast(ToastKind::Success, "Poll data exported successfully!"),
                    Err(e) => {
                        warn!("Download failed: {e:?}");
                        ctx.toast(ToastKind::Error, "Failed to export polls. Please try again.");
                    }
                },
                Err(e) => ctx.report("Failed to export polls. ", &e),
            }
        });
    }
}

fn current_route() -> Route {
    let hash = window().location().hash().unwrap_or_default();
    Route::from_fragment(&hash)
}

/// Hands `contents` to the browser as a file download.
fn download(file_name: &str, mime: &str, contents: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(contents));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime);
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor: web_sys::HtmlAnchorElement = document().create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();

    set_timeout(
        move || {
            let _ = web_sys::Url::revoke_object_url(&url);
        },
        std::time::Duration::from_secs(7),
    );
    Ok(())
}

/// Root component. Builds the application object once and serves the single page.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Stylesheet id="leptos" href="/pkg/poll-client.css"/>
        <Title text="Polls"/>
        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <PathRoute path=path!("") view=PollsPage/>
                </Routes>
            </main>
        </Router>
    }
}

/// The whole poll UI; the fragment decides between list and detail.
#[component]
fn PollsPage() -> impl IntoView {
    let ctx = Ctx::new();
    provide_context(ctx);

    // Effects only run in the browser, so the server renders the loading state.
    Effect::new(move |_| {
        ctx.dispatch(current_route());
        let _ = window_event_listener(ev::hashchange, move |_| ctx.dispatch(current_route()));
    });

    view! {
        <header class="toolbar">
            <h1 on:click=move |_| ctx.navigate(Route::List)>"Polls"</h1>
            <input
                id="search-polls"
                type="search"
                placeholder="Search polls..."
                prop:value=move || ctx.search.get()
                on:input=move |ev| ctx.schedule_search(event_target_value(&ev))
            />
            <select
                id="sort-polls"
                on:change=move |ev| {
                    if let Ok(key) = event_target_value(&ev).parse::<SortKey>() {
                        ctx.sort.set(key);
                        ctx.navigate(Route::List);
                    }
                }
            >
                {SortKey::ALL
                    .into_iter()
                    .map(|key| {
                        view! {
                            <option value=key.as_str() prop:selected=move || ctx.sort.get() == key>
                                {key.label()}
                            </option>
                        }
                    })
                    .collect_view()}
            </select>
            <button id="create-poll-btn" on:click=move |_| ctx.open_create()>"Create Poll"</button>
            <button id="export-polls-btn" on:click=move |_| ctx.export()>"Export CSV"</button>
        </header>

        <section class="content">
            {move || match ctx.screen.get() {
                Screen::Loading => view! { <p class="placeholder">"Loading..."</p> }.into_any(),
                Screen::List(polls) => view! { <PollList polls/> }.into_any(),
                Screen::Detail(detail) => view! { <PollDetailView detail/> }.into_any(),
                Screen::Failed(message) => view! { <ErrUI message/> }.into_any(),
                Screen::Login => view! { <LoginForm/> }.into_any(),
                Screen::Create => view! { <CreatePollForm/> }.into_any(),
            }}
        </section>

        <div id="loading" class="loading-overlay" class:hidden=move || ctx.busy.get() == 0>
            <div class="spinner"></div>
        </div>

        <div id="toast-container">
            <For
                each=move || ctx.toasts.get()
                key=|toast| toast.id
                children=move |toast| {
                    let class = match toast.kind {
                        ToastKind::Success => "toast toast-success",
                        ToastKind::Info => "toast toast-info",
                        ToastKind::Error => "toast toast-error",
                    };
                    let id = toast.id;
                    view! {
                        <div class=class>
                            <span>{toast.message}</span>
                            <button on:click=move |_| ctx.dismiss(id)>"×"</button>
                        </div>
                    }
                }
            />
        </div>
    }
}

/// Shown in place of a view that failed to load.
#[component]
fn ErrUI(message: String) -> impl IntoView {
    view! {
        <div class="error-card">
            <p style="color:red;">{message}</p>
        </div>
    }
}
