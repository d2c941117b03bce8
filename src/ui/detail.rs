use leptos::ev::SubmitEvent;
use leptos::leptos_dom::helpers::window;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;

use super::{Ctx, ToastKind};
use crate::app::PollDetail;
use crate::chart::ChartModel;
use crate::router::Route;

/// One poll: ballot or "already voted" notice, actions, and results.
#[component]
pub(super) fn PollDetailView(detail: PollDetail) -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let PollDetail { poll, has_voted } = detail;
    let chart = ctx
        .chart
        .with_untracked(|slot| slot.current().map(|chart| chart.model.clone()));

    let ballot = if has_voted {
        view! {
            <div class="voted-notice">
                <p>"You have already voted on this poll."</p>
            </div>
        }
        .into_any()
    } else {
        view! { <Ballot poll=poll.clone()/> }.into_any()
    };

    let poll_id = poll.id.clone();
    let on_delete = move |_| {
        let confirmed = window()
            .confirm_with_message("Are you sure you want to delete this poll?")
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        let poll_id = poll_id.clone();
        spawn_local(async move {
            let _loading = ctx.loading();
            match ctx.app().delete_poll(&poll_id).await {
                Ok(_) => {
                    ctx.toast(ToastKind::Success, "Poll deleted successfully!");
                    ctx.navigate(Route::List);
                }
                Err(e) => ctx.report("Failed to delete poll. ", &e),
            }
        });
    };

    view! {
        <div id="poll-detail" class="poll-detail">
            <div class="poll-content">
                <h2>{poll.question.clone()}</h2>
                <div class="poll-meta">
                    <span>{poll.total_votes} " votes"</span>
                    <span>"Created " {poll.created_date()}</span>
                </div>
                {ballot}
                <button id="back-to-list-btn" on:click=move |_| ctx.navigate(Route::List)>
                    "Back to Poll List"
                </button>
                <button id="delete-poll-btn" class="danger" on:click=on_delete>
                    "Delete Poll"
                </button>
            </div>
            {chart.map(|model| view! { <ResultsChart model/> })}
        </div>
    }
}

/// Radio ballot; the submit button is disabled while the vote is in flight.
#[component]
fn Ballot(poll: crate::Poll) -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let selected = RwSignal::new(None::<usize>);
    let pending = RwSignal::new(false);
    let options = poll.options.clone();
    let poll = StoredValue::new(poll);

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        if pending.get_untracked() {
            return;
        }
        pending.set(true);
        let poll = poll.get_value();
        let choice = selected.get_untracked();
        spawn_local(async move {
            let _loading = ctx.loading();
            let result = ctx.app().vote(&poll, choice).await;
            pending.try_set(false);
            match result {
                Ok(refreshed) => {
                    ctx.toast(ToastKind::Success, "Vote recorded successfully!");
                    ctx.show_vote(poll.id.clone(), refreshed);
                }
                Err(e) => {
                    warn!("Vote on {} failed: {e}", poll.id);
                    ctx.report("Failed to submit vote. ", &e);
                }
            }
        });
    };

    view! {
        <form id="vote-form" on:submit=on_submit>
            {options
                .into_iter()
                .enumerate()
                .map(|(i, option)| {
                    let input_id = format!("option-{i}");
                    view! {
                        <div class="ballot-option">
                            <input
                                type="radio"
                                id=input_id.clone()
                                name="pollOption"
                                value=i.to_string()
                                required=true
                                on:change=move |_| selected.set(Some(i))
                            />
                            <label for=input_id>{option}</label>
                        </div>
                    }
                })
                .collect_view()}
            <button type="submit" disabled=move || pending.get()>
                "Submit Vote"
            </button>
        </form>
    }
}

/// Horizontal bars, one per option; hover shows count and share.
#[component]
fn ResultsChart(model: ChartModel) -> impl IntoView {
    let max = model.max_votes();

    view! {
        <div id="chart-container" class="results-chart">
            <h3>"Results"</h3>
            {model
                .bars
                .into_iter()
                .map(|bar| {
                    view! {
                        <div class="bar-row" title=bar.tooltip>
                            <span class="bar-label">{bar.label}</span>
                            <div class="bar-track">
                                <div
                                    class="bar-fill"
                                    style=format!("width: {:.1}%", bar.length_pct)
                                ></div>
                            </div>
                            <span class="bar-count">{bar.votes}</span>
                        </div>
                    }
                })
                .collect_view()}
            <p class="axis-label">"Number of Votes (0 - " {max} ")"</p>
        </div>
    }
}
