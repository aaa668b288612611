// server/src/http/handlers_billing.rs
//! Billing: full CRUD plus the revenue summary shown above the list. The
//! amount is parsed and validated before any write; a zero, negative, or
//! non-numeric amount writes nothing.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::NaiveDate;
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::{ClinicStore, BillingRow};
use models::errors::{ValidationError, ValidationResult};
use models::medical::billing::parse_amount;
use models::{BillingUpdate, NewBilling, PaymentStatus};

use crate::http::render::{esc, page};
use crate::http::{
    error_redirect, flash_redirect, parse_id, require_login, user_message, SharedState,
};

#[derive(Debug, Deserialize)]
pub struct BillingForm {
    #[serde(default)]
    pub patient_id: String,
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub payment_method: String,
    pub payment_status: Option<String>,
    pub payment_date: Option<String>,
    pub notes: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_date(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))
}

impl BillingForm {
    fn into_new(self) -> ValidationResult<NewBilling> {
        let bill = NewBilling {
            patient_id: self
                .patient_id
                .trim()
                .parse()
                .map_err(|_| ValidationError::missing("patient_id"))?,
            appointment_id: non_empty(self.appointment_id)
                .map(|v| v.parse().map_err(|_| ValidationError::InvalidValue("appointment_id".to_string())))
                .transpose()?,
            amount: parse_amount(&self.amount)?,
            payment_method: self.payment_method.trim().to_string(),
            notes: non_empty(self.notes),
        };
        bill.validate()?;
        Ok(bill)
    }

    fn into_update(self) -> ValidationResult<BillingUpdate> {
        let status = match non_empty(self.payment_status) {
            Some(s) => PaymentStatus::parse(&s)?,
            None => PaymentStatus::default(),
        };
        let update = BillingUpdate {
            amount: parse_amount(&self.amount)?,
            payment_method: self.payment_method.trim().to_string(),
            payment_status: status,
            payment_date: non_empty(self.payment_date).map(|d| parse_date(&d)).transpose()?,
            notes: non_empty(self.notes),
        };
        update.validate()?;
        Ok(update)
    }
}

const ADD_FORM: &str = "<h3>Add billing record</h3>\n\
<form method=\"post\" action=\"/billing\">\n\
<label>Patient ID <input name=\"patient_id\"></label>\n\
<label>Appointment ID <input name=\"appointment_id\"></label>\n\
<label>Amount <input name=\"amount\"></label>\n\
<label>Payment method <select name=\"payment_method\">\
<option value=\"Cash\">Cash</option><option value=\"Card\">Card</option>\
<option value=\"Insurance\">Insurance</option></select></label>\n\
<label>Notes <textarea name=\"notes\"></textarea></label>\n\
<button type=\"submit\">Add Billing</button>\n</form>\n";

fn table(rows: &[BillingRow]) -> String {
    let mut out = String::from(
        "<table>\n<tr><th>Created</th><th>Patient</th><th>Amount</th><th>Method</th>\
         <th>Status</th><th></th></tr>\n",
    );
    for row in rows {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/billing/{}\">View</a> \
             <a href=\"/billing/{}/edit\">Edit</a> \
             <form method=\"post\" action=\"/billing/{}/delete\">\
             <button type=\"submit\">Delete</button></form></td></tr>\n",
            row.billing.created_at.format("%Y-%m-%d"),
            esc(&row.patient_name),
            row.billing.amount,
            esc(&row.billing.payment_method),
            row.billing.payment_status,
            row.billing.id,
            row.billing.id,
            row.billing.id,
        ));
    }
    out.push_str("</table>\n");
    out
}

pub async fn list(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let summary = match state.store.billing_summary(&ctx).await {
        Ok(summary) => summary,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };
    let rows = match state.store.list_billing(&ctx).await {
        Ok(rows) => rows,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };

    let body = format!(
        "<h2>Billing</h2>\n\
         <ul>\n\
         <li>Total revenue: {:.2}</li>\n\
         <li>Pending amount: {:.2}</li>\n\
         <li>Today's collections: {:.2}</li>\n\
         </ul>\n{}{}",
        summary.total_revenue,
        summary.pending_amount,
        summary.today_collections,
        table(&rows),
        ADD_FORM
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Billing", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<BillingForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let new_bill = match form.into_new() {
        Ok(new_bill) => new_bill,
        Err(err) => {
            return flash_redirect(&state, &ctx, Flash::error(user_message(&err.into())), "/billing")
                .await
        }
    };
    match state.store.insert_billing(&ctx, &new_bill).await {
        Ok(_) => {
            flash_redirect(&state, &ctx, Flash::success("Billing record added successfully."), "/billing")
                .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/billing").await,
    }
}

pub async fn detail(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let row = match parse_id(&id) {
        Ok(id) => match state.store.find_billing(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/billing").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/billing").await,
    };
    let body = format!(
        "<h2>Billing Record</h2>\n<ul>\n\
         <li>Patient: {}</li>\n<li>Amount: {:.2}</li>\n<li>Method: {}</li>\n\
         <li>Status: {}</li>\n<li>Payment date: {}</li>\n\
         <li>Appointment time: {}</li>\n<li>Notes: {}</li>\n</ul>\n\
         <p><a href=\"/billing/{}/edit\">Edit</a></p>\n",
        esc(&row.patient_name),
        row.billing.amount,
        esc(&row.billing.payment_method),
        row.billing.payment_status,
        row.billing.payment_date.map(|d| d.to_string()).unwrap_or_default(),
        row.appointment_time.map(|t| t.to_string()).unwrap_or_default(),
        esc(row.billing.notes.as_deref().unwrap_or("")),
        row.billing.id,
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Billing Record", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

fn edit_body(row: &BillingRow, error: Option<&str>) -> String {
    let banner = error
        .map(|e| format!("<p class=\"flash error\">{}</p>\n", esc(e)))
        .unwrap_or_default();
    let mut options = String::new();
    for status in [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Cancelled] {
        let selected = if status == row.billing.payment_status { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            status, selected, status
        ));
    }
    format!(
        "<h2>Edit billing for {}</h2>\n{}\
         <form method=\"post\" action=\"/billing/{}/edit\">\n\
         <label>Amount <input name=\"amount\" value=\"{:.2}\"></label>\n\
         <label>Payment method <input name=\"payment_method\" value=\"{}\"></label>\n\
         <label>Status <select name=\"payment_status\">{}</select></label>\n\
         <label>Payment date <input type=\"date\" name=\"payment_date\" value=\"{}\"></label>\n\
         <label>Notes <textarea name=\"notes\">{}</textarea></label>\n\
         <button type=\"submit\">Save</button>\n</form>\n",
        esc(&row.patient_name),
        banner,
        row.billing.id,
        row.billing.amount,
        esc(&row.billing.payment_method),
        options,
        row.billing.payment_date.map(|d| d.to_string()).unwrap_or_default(),
        esc(row.billing.notes.as_deref().unwrap_or("")),
    )
}

pub async fn edit_form(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let row = match parse_id(&id) {
        Ok(id) => match state.store.find_billing(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/billing").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/billing").await,
    };
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Edit Billing", &ctx.doctor_name, flash.as_ref(), &edit_body(&row, None)).into_response()
}

pub async fn edit_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<BillingForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/billing").await,
    };
    let update = match form.into_update() {
        Ok(update) => update,
        Err(err) => {
            return match state.store.find_billing(&ctx, id).await {
                Ok(row) => page(
                    "Edit Billing",
                    &ctx.doctor_name,
                    None,
                    &edit_body(&row, Some(&user_message(&err.into()))),
                )
                .into_response(),
                Err(err) => error_redirect(&state, &ctx, err, "/billing").await,
            };
        }
    };
    match state.store.update_billing(&ctx, id, &update).await {
        Ok(()) => {
            flash_redirect(&state, &ctx, Flash::success("Billing record updated successfully."), "/billing")
                .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/billing").await,
    }
}

pub async fn delete(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/billing").await,
    };
    match state.store.delete_billing(&ctx, id).await {
        Ok(()) => {
            flash_redirect(&state, &ctx, Flash::success("Billing record deleted successfully."), "/billing")
                .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/billing").await,
    }
}
